//! End to end tests, they expect the catalog service to be running on `BOOKSERVICE_URL`
//! (default `http://127.0.0.1:5000`) and are only compiled with the `system_tests` feature.
