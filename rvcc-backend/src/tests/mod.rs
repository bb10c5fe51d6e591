//! Whole-pipeline tests: IR text in, assembly text out
