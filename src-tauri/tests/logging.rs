#[test]
fn second_tracing_install_reports_error_instead_of_panicking() {
    rainbow_tabs_lib::init_tracing().expect("first install succeeds");

    let err = rainbow_tabs_lib::init_tracing().expect_err("subscriber already installed");
    assert!(!err.to_string().is_empty());
}
