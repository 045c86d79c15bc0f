// Market data module entrypoint
pub mod adapters; // order feeds (hardcoded replay, in-process channels)
