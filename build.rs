//! Build script selecting the platform synchronization backends
//!
//! Emits one cfg per available facility so the library can compile exactly the
//! wait/wake and kernel-semaphore layers the target offers:
//!
//! - `dualsem_futex`: Linux-style `futex(2)` address wait
//! - `dualsem_wait_on_address`: Windows `WaitOnAddress` family (resolved at runtime)
//! - `dualsem_posix_sem`: unnamed POSIX semaphores (`sem_init`)
//! - `dualsem_emulated_kernel`: mutex/condvar stand-in for targets without either kernel object

use std::env;

const CFGS: &[&str] = &[
    "dualsem_futex",
    "dualsem_wait_on_address",
    "dualsem_posix_sem",
    "dualsem_emulated_kernel",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");

    for cfg in CFGS {
        println!("cargo::rustc-check-cfg=cfg({})", cfg);
    }

    configure_address_wait();
    configure_kernel_semaphore();
}

/// Pick the address wait/wake facility compiled into the fast path
fn configure_address_wait() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    match target_os.as_str() {
        "linux" | "android" => println!("cargo:rustc-cfg=dualsem_futex"),
        "windows" => println!("cargo:rustc-cfg=dualsem_wait_on_address"),
        other => {
            println!(
                "cargo:warning=No address wait facility for target os '{}'; only the kernel fallback is available",
                other
            );
        }
    }
}

/// Pick the kernel wait object compiled into the fallback path
fn configure_kernel_semaphore() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let target_family = env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    let target_vendor = env::var("CARGO_CFG_TARGET_VENDOR").unwrap_or_default();

    if target_os == "windows" {
        // CreateSemaphoreW needs no extra cfg; it is selected by cfg(windows)
        return;
    }

    // Apple platforms declare sem_init but always fail it with ENOSYS
    if target_family.split(',').any(|f| f == "unix") && target_vendor != "apple" {
        println!("cargo:rustc-cfg=dualsem_posix_sem");
        if target_os == "linux" {
            // sem_* live in libpthread on older glibc
            println!("cargo:rustc-link-lib=pthread");
        }
    } else {
        println!("cargo:rustc-cfg=dualsem_emulated_kernel");
    }
}
