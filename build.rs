use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Debug builds log everything
    if env::var("PROFILE").unwrap() == "debug" {
        println!("cargo:rustc-cfg=feature=\"debug\"");
    }

    // Host builds (tests, simulation) need nothing else
    let target = env::var("TARGET").unwrap();
    if !target.contains("avr") {
        return;
    }

    // Configure for ATmega328P
    println!("cargo:rustc-link-arg=-mmcu=atmega328p");
    println!("cargo:warning=Building for ATmega328P at 16MHz");
}
