//! Create an admin account in the portal database

use portal_rs::config::Config;
use portal_rs::store::types::Role;
use portal_rs::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <email> <password> <display-name>", args[0]);
        eprintln!("Example: {} admin@example.com secret123 \"Portal Admin\"", args[0]);
        std::process::exit(1);
    }

    let email = &args[1];
    let password = &args[2];
    let display_name = &args[3];

    let config = if std::path::Path::new("config.toml").exists() {
        Config::from_file("config.toml")?
    } else {
        Config::default()
    };

    println!("Creating admin account: {}", email);

    let store = Store::connect(&config.storage.database_url).await?;
    let account = store
        .create_account(email, password, display_name, Role::Admin)
        .await?;

    println!("✅ Admin account created");
    println!("   Id:    {}", account.id);
    println!("   Email: {}", account.email);

    Ok(())
}
