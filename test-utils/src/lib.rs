//! `test-utils` is used for testing `marquee-lib`.
//! This crate does not depend on `marquee-lib`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Create a mock web server which answers the first `$limited` requests with
/// `429 Too Many Requests` and every later request with `$status`.
///
/// The `429` responses carry `Retry-After: $retry_after` unless it is
/// `None`. Both mocks verify their call counts when the server is dropped:
/// exactly `$limited` rate-limited responses and `$final_calls` final ones.
#[macro_export]
macro_rules! rate_limited_mock_server {
    ($limited:expr, $retry_after:expr, $status:expr, $final_calls:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;

        let mut limited = wiremock::ResponseTemplate::new(http::StatusCode::TOO_MANY_REQUESTS);
        let retry_after: Option<&str> = $retry_after;
        if let Some(value) = retry_after {
            limited = limited.insert_header("Retry-After", value);
        }
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(limited)
            .up_to_n_times($limited)
            .expect($limited)
            .mount(&mock_server)
            .await;

        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(http::StatusCode::from($status)))
            .expect($final_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }};
}

/// Create a mock web server which answers every request with
/// `429 Too Many Requests` and the given `Retry-After` header.
#[macro_export]
macro_rules! always_rate_limited_mock_server {
    ($retry_after:expr, $expected_calls:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        let template = wiremock::ResponseTemplate::new(http::StatusCode::TOO_MANY_REQUESTS)
            .insert_header("Retry-After", $retry_after);
        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(template)
            .expect($expected_calls)
            .mount(&mock_server)
            .await;
        mock_server
    }};
}

/// Replace the host of a mock server URI with `localhost`, so that the
/// connection goes through name resolution.
///
/// # Panic
///
/// This panics if the URI has no port, so it should only be used for testing
#[macro_export]
macro_rules! localhost_uri {
    ($mock_server:expr) => {{
        let uri = url::Url::parse(&$mock_server.uri()).expect("Expected valid mock server URL");
        let port = uri.port().expect("Expected mock server URL with a port");
        format!("http://localhost:{port}")
    }};
}
