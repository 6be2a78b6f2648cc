fn main() {
    // Only the firmware build needs the ESP-IDF environment; host tests
    // compile the pure-logic library with no build-time tooling.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
