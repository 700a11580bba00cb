// # Agent Module
//
// The autonomous whale-analysis agent and its collaborators:
// - `orchestrator`: the four-phase analysis pipeline
// - `selector`: budget-bounded catalog selection
// - `purchaser`: USDC settlement plus paid data fetch
// - `synthesizer`: final report assembly with deterministic cost accounting
// - `ai_client`: OpenAI chat-completions transport and JSON-block decoding
// - `catalog`: the fixed paid-data catalog
// - `types`: agent errors and the shared data model

pub mod ai_client;
pub mod catalog;
pub mod orchestrator;
pub mod purchaser;
pub mod selector;
pub mod synthesizer;
pub mod types;

pub use ai_client::AIClient;
pub use orchestrator::WhaleAnalysisAgent;
pub use purchaser::UsdcPurchaseExecutor;
