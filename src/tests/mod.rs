// src/tests/mod.rs

mod connector_tests;
