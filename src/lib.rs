pub mod cache;
pub mod canon;
pub mod depfile;
pub mod discover;
pub mod fs;
pub mod graph;
pub mod hash;
pub mod include;
mod lexer;
pub mod registry;
pub mod resolve;
pub mod run;
pub mod search_path;
pub mod trace;
pub mod tree;
pub mod warnings;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;
