//! Print a bcrypt hash for the admin password, ready for `.env`.

use bcrypt::{hash, DEFAULT_COST};
use std::env;

fn main() {
    let Some(password) = env::args().nth(1) else {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    };
    if password.len() < 8 {
        eprintln!("Refusing to hash a password shorter than 8 characters.");
        std::process::exit(1);
    }

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("\nCost : {}", DEFAULT_COST);
            println!("Hash : {}\n", hashed);
            println!("# Add to .env for the blog admin login:");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
