pub mod answer_key;
pub mod candidate;
pub mod scored;
pub mod subject;
