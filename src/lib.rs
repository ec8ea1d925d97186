//! # office-loader
//!
//! Document acquisition and load orchestration for an office viewer backed
//! by the x2t conversion engine.
//!
//! A document can arrive three ways: picked from local disk, fetched from a
//! URL, or streamed in base64 chunks over a message channel. Each path ends
//! in the same sequence: the document becomes the session's current record,
//! the engine is initialized, and the document is opened. Failures bring
//! the control panel back instead of leaving the UI stuck on a spinner.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────┐  ┌─────────────┐
//! │ FilePicker │  │ HTTP fetch │  │  /messages  │
//! └─────┬──────┘  └─────┬──────┘  │ChunkAssembler│
//!       │               │         └──────┬──────┘
//!       └───────────────┼────────────────┘
//!                       ▼
//!           ┌───────────────────────┐     ┌──────────────────┐
//!           │AcquisitionOrchestrator│────▶│ ConversionGateway│
//!           └───────────┬───────────┘     │   (x2t process)  │
//!                       ▼                 └──────────────────┘
//!           panel / loading / menu guide
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! oload open ./report.docx            # open a local file
//! oload pick                          # prompt for a file (5 s to answer)
//! oload fetch https://host/q3.xlsx    # download and open
//! oload new slide                     # blank presentation
//! oload stream ./transfer.jsonl       # replay channel messages
//! oload serve                         # HTTP message channel
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Chunks, document records, acquisition results |
//! | [`chunk`] | Chunked-transfer reassembly |
//! | [`session`] | Current document holder |
//! | [`orchestrator`] | Acquisition paths and the common load tail |
//! | [`picker`] | File picker race and CLI pickers |
//! | [`fetch`] | Remote download and file name derivation |
//! | [`engine`] | Subprocess-backed conversion engine |
//! | [`channel`] | Typed message dispatch |
//! | [`ui`] | Panel state machine, loading indicator, menu guide |
//! | [`store`] | Persisted UI flags |
//! | [`server`] | HTTP server |

pub mod app;
pub mod channel;
pub mod chunk;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod models;
pub mod orchestrator;
pub mod picker;
pub mod server;
pub mod session;
pub mod store;
pub mod traits;
pub mod ui;
