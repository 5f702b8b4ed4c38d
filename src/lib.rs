pub mod error;
pub mod config;
pub mod logging;
pub mod profile;
pub mod request;
pub mod prompt;
pub mod cleanup;
pub mod retry;
pub mod catalog;
pub mod schema;
pub mod store;
pub mod providers;
pub mod pipeline;
pub mod coach;
pub mod tracking;

/*

trainer-ai: the coaching backend behind the fitness app. Users
submit a profile and get AI-generated workout and meal plans,
exercise explanations and short chat answers; workouts they log
feed streaks, levels and a leaderboard.

trainer-ai/
├── src/
│   ├── lib.rs          # Re-exports
│   ├── error.rs        # Error taxonomy (caller, upstream, store)
│   ├── config.rs       # Service, retry and store configuration
│   ├── logging.rs      # env_logger setup
│   ├── profile.rs      # Account and profile records
│   ├── request.rs      # GenerationRequest / GenerationResult
│   ├── prompt.rs       # Prompt synthesis per request kind
│   ├── cleanup.rs      # Fence stripping, JSON extraction
│   ├── retry.rs        # Throttle retry policy
│   ├── catalog.rs      # Static fallback explanations
│   ├── schema.rs       # Optional plan shape checks
│   ├── store.rs        # DocumentStore / ProfileStore + backends
│   ├── pipeline.rs     # Cache -> call -> clean -> parse -> persist
│   ├── coach.rs        # Caller-facing operations
│   ├── tracking.rs     # Workout logs, streaks, leaderboard
│   ├── providers/      # TextGenerator implementations
│   │   ├── gemini.rs   # Gemini API client actor
│   │   └── scripted.rs # Offline replay generator
│   └── bin/trainer-ai.rs
└── tests/              # Pipeline scenarios with fakes

*/

pub use coach::Coach;
pub use config::AppConfig;
pub use error::{Error, GenerateError, StoreError};
pub use pipeline::GenerationPipeline;
pub use providers::TextGenerator;
pub use request::{GenerationRequest, GenerationResult, RequestKind};
pub use store::{DocumentStore, JsonFileStore, MemoryStore, ProfileStore};
pub use tracking::Tracker;
