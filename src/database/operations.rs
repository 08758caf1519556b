/// Database operations for storing climate records
use tokio_postgres::Client;

use crate::error::Result;
use crate::models::ClimateRecord;

const INSERT_CLIMATE_RECORD: &str =
    "INSERT INTO climate_data(measurement, room, time, temperature, humidity)
     VALUES ($1, $2, $3, $4, $5)";

/// Store one cycle's records in a single transaction
///
/// Either every record of the batch is stored or none is.
///
/// # Returns
/// Number of rows inserted
pub async fn store_climate_records(client: &mut Client, records: &[ClimateRecord]) -> Result<u64> {
    let transaction = client.transaction().await?;
    let statement = transaction.prepare(INSERT_CLIMATE_RECORD).await?;

    let mut inserted = 0;
    for record in records {
        inserted += transaction
            .execute(
                &statement,
                &[
                    &record.measurement,
                    &record.room,
                    &record.time,
                    &record.temperature,
                    &record.humidity,
                ],
            )
            .await?;
    }

    transaction.commit().await?;
    Ok(inserted)
}
