//! End-to-end checks that wire the real HTTP providers to mocked upstream
//! APIs and drive them through the pipeline and the JSON-RPC dispatcher.
