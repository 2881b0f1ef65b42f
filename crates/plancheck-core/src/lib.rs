//! Structural validation of markdown task plans and keyword routing of
//! free text to documentation sections.
//!
//! The modules are layered leaf-first:
//!
//! - [`document`] parses plan markdown into a [`document::PlanDocument`];
//! - [`graph`] checks task IDs and the dependency graph;
//! - [`agents`] knows which executor types exist;
//! - [`router`] maps free text to section identifiers;
//! - [`sections`] loads the documentation those identifiers name;
//! - [`discovery`] picks which plan to validate;
//! - [`pipeline`] runs every check and produces a verdict.

pub mod agents;
pub mod discovery;
pub mod document;
pub mod graph;
pub mod pipeline;
pub mod router;
pub mod sections;
