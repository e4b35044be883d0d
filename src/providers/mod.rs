pub mod kobold;
pub mod openrouter;

pub use kobold::KoboldApi;
pub use openrouter::OpenRouterApi;
