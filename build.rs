// SPDX-License-Identifier: Apache-2.0

use std::env;

fn main() {
    let target = env::var("TARGET").unwrap();
    let target_os = target.split('-').nth(2).unwrap_or("none");

    // If we're not running on a desktop-class operating system, emit the "baremetal"
    // config setting. This will enable software to do tasks such as
    // managing memory.
    if target_os == "none" {
        println!("cargo:rustc-cfg=baremetal");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
