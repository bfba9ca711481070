pub mod embedding;
pub mod popularity;
pub mod recommendation;
pub mod similarity;
