fn main() {
    // Generates OUT_DIR/built.rs with the git commit used by the health endpoint.
    built::write_built_file().expect("Failed to acquire build-time information");
}
