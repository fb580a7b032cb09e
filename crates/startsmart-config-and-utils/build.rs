fn main() {
    // option_env!() values are cached; rebuild when the baked-in key changes.
    println!("cargo:rerun-if-env-changed=STARTSMART_FIREBASE_API_KEY");
}
