use log::{debug, error};
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio_postgres::{Client, NoTls};
use url::Url;

use crate::error::Result;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector> {
    let mut builder = SslConnector::builder(SslMethod::tls())?;
    builder.set_ca_file(sslrootcert_path)?;
    builder.set_verify(SslVerifyMode::PEER);

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` query parameter off a connection URL
///
/// tokio-postgres does not understand `sslrootcert`, so it is removed from the
/// URL and returned separately. Other query parameters are kept.
pub fn split_sslrootcert(database_url: &str) -> Result<(String, Option<String>)> {
    let url = Url::parse(database_url)?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.into_owned());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        clean_url.query_pairs_mut().extend_pairs(clean_params);
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

/// Open a connection, using TLS when the URL names a root certificate
///
/// The connection future is driven by a spawned task which ends when the
/// returned client is dropped.
pub async fn connect(database_url: &str) -> Result<Client> {
    let (clean_database_url, sslrootcert_path) = split_sslrootcert(database_url)?;

    let client = match sslrootcert_path {
        Some(path) => {
            debug!("Connecting to database with TLS (CA {})", path);
            let connector = create_ssl_connector(&path)?;
            let (client, connection) = tokio_postgres::connect(&clean_database_url, connector).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
        None => {
            debug!("Connecting to database without TLS");
            let (client, connection) = tokio_postgres::connect(&clean_database_url, NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!("Connection error: {}", e);
                }
            });
            client
        }
    };

    Ok(client)
}
