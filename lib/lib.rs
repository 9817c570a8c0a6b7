//! Quadflow: iterative dataflow analysis over quad control flow graphs.
//!
//! Analyses implement [`analysis::Analysis`] (one In/Out value per quad) or
//! [`analysis::EdgeAnalysis`] (one Out value per successor edge), and are
//! driven to a fixed point by [`analysis::ReferenceSolver`] or
//! [`analysis::EdgeSolver`] respectively.

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate petgraph;
extern crate serde;
extern crate serde_json;

pub mod analysis;
pub mod driver;
pub mod ir;

pub mod error {
    error_chain! {
        types {
            Error, ErrorKind, ResultExt, Result;
        }

        foreign_links {
            Io(::std::io::Error);
            Json(::serde_json::Error);
        }

        errors {
            Unsupported(operation: String) {
                description("An operation forbidden by the storage model was called")
                display("Unsupported operation: {}", operation)
            }
            Uninitialized {
                description("An analysis was queried before preprocess")
                display("Analysis values were accessed before preprocess ran")
            }
            UnknownQuad(id: usize) {
                description("A quad id is not part of the control flow graph")
                display("Unknown quad {}", id)
            }
            UnknownBlock(index: usize) {
                description("A block index is not part of the control flow graph")
                display("Unknown block 0x{:x}", index)
            }
            UnknownEdge(quad: usize, neighbor: String) {
                description("A quad has no edge to the requested neighbor")
                display("Quad {} has no edge to {}", quad, neighbor)
            }
            UnknownPass(name: String) {
                description("No pass is registered under this name")
                display("Unknown pass \"{}\"", name)
            }
            Graph(m: String) {
                description("A malformed control flow graph")
                display("Control flow graph error: {}", m)
            }
        }
    }
}
