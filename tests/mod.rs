mod retry_tests;
mod support;
mod transport_tests;
