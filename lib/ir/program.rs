use crate::error::*;
use crate::ir::*;
use serde::{Deserialize, Serialize};

/// A compiled unit: the functions a pass is run over.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Program {
    functions: Vec<Function>,
}

impl Program {
    pub fn from_json(json: &str) -> Result<Program> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn functions_mut(&mut self) -> &mut [Function] {
        &mut self.functions
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|function| function.name() == name)
    }
}
