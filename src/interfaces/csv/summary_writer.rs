use crate::application::engine::EnrollmentSummary;
use crate::error::Result;
use std::io::Write;

/// Writes the batch-import summary as CSV, one row per enrollment.
pub fn write_summaries<W: Write>(sink: W, summaries: &[EnrollmentSummary]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enrollment::EnrollmentStatus;
    use crate::domain::plan::Frequency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_csv_shape() {
        let summaries = vec![EnrollmentSummary {
            user: "alice@example.com".to_string(),
            plan: "Starter".to_string(),
            frequency: Frequency::Daily,
            contributed: dec!(300),
            payout: dec!(5000),
            status: EnrollmentStatus::Active,
        }];
        let mut buffer = Vec::new();
        write_summaries(&mut buffer, &summaries).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "user,plan,frequency,contributed,payout,status\n\
             alice@example.com,Starter,DAILY,300,5000,ACTIVE\n"
        );
    }
}
