//! Session commands: login, logout and whoami.

use cirrus_core::Client;
use std::io::BufRead;

/// Opens a session; the password is read from stdin when not given.
pub async fn login(
    client: &Client,
    username: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("password: ");
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let user = client.users().login(username, &password).await?;
    eprintln!("logged in as {} ({})", user.username(), user.id().unwrap_or_default());
    Ok(())
}

/// Ends the stored session.
pub async fn logout(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
    client.users().logout().await?;
    eprintln!("logged out");
    Ok(())
}

/// Prints the logged-in user.
pub fn whoami(client: &Client) {
    match client.users().current_user() {
        Some(user) => println!("{}", user.username()),
        None => eprintln!("not logged in"),
    }
}
