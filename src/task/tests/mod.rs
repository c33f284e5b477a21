mod cascade_tests;
mod store_tests;
mod support;
