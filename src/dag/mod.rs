// src/dag/mod.rs

//! Task graph: named leaf, sequence and parallel tasks.

pub mod graph;

pub use graph::{TaskGraph, TaskNode};
