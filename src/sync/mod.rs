pub mod abi;
pub mod fetcher;
pub mod rpc;
pub mod state;
pub mod synchronizer;
