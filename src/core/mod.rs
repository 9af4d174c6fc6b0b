pub mod assembler;
pub mod context;
pub mod facts;
pub mod grammar;
pub mod phrase_bank;
pub mod pipeline;
pub mod sampler;
pub mod standings;
pub mod store;
pub mod timeline;
pub mod trend;
pub mod variety;
pub mod variant;
