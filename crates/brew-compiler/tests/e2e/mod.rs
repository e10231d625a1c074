//! End-to-end tests for the Brew compiler
//!
//! These tests build classes through the public builder API, compile them
//! to class file bytes and execute the result on a small interpreter.

mod harness;
mod arrays;
mod control_flow;
mod dead_methods;
mod errors;
