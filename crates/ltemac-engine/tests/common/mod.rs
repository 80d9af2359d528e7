#![allow(dead_code)]

mod session_test;

pub use session_test::*;
