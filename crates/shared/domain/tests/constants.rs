use hb_domain::constants::{ARTIFACT_NAME, BINARY_NAME, TARGET_TRIPLE, archive_name};

#[test]
fn release_names_line_up() {
    assert_eq!(TARGET_TRIPLE, "armv7-unknown-linux-gnueabihf");
    assert_eq!(ARTIFACT_NAME, "arm-build");
    assert_eq!(archive_name(BINARY_NAME), "heartbeat-acquisition-rpi.tar.gz");
}
