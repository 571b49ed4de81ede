//! Checkpointed stack executor: the call/create protocol over an
//! explicit frame stack.

mod executor;
mod precompile;
mod state;

pub use self::executor::StackExecutor;
pub use self::precompile::PrecompileSet;
pub use self::state::{MemoryStackState, MemoryStackSubstate, StackState};
