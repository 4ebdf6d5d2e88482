pub mod language;
pub mod problem;

pub use language::{IndentStyle, Language};
pub use problem::{
    canonical_problem_url, slug_from_url, slugify_title, ProblemContext, SolutionArtifact,
};
