#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod compose;
pub mod expand;
pub mod generate;
pub mod rerank;

pub use compose::{first_sentence, Asker, DONT_KNOW};
pub use expand::{expand_query, Expansion};
pub use generate::{ChatGenerator, Generator, SYSTEM_PROMPT};
pub use rerank::{adjusted_score, rerank, RerankTuning};
