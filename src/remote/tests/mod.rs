// src/remote/tests/mod.rs
