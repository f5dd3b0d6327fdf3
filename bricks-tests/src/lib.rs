//! End-to-end tests for bricks live under `tests/`.
