fn main() {
    println!("cargo:rerun-if-changed=sdkconfig.defaults");

    if std::env::var("ESP_IDF_SDKCONFIG_DEFAULTS").is_err() {
        println!(
            "cargo:warning=ESP_IDF_SDKCONFIG_DEFAULTS not set, using crates/epaper-firmware/sdkconfig.defaults"
        );
    }

    embuild::espidf::sysenv::output();
}
