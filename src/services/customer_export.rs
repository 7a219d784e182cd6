//! Customer spreadsheets generated for download

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::services::customer_import::validator::REQUIRED_COLUMNS;
use crate::types::customer::Customer;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const TEMPLATE_FILENAME: &str = "customer_import_template.xlsx";

const TEMPLATE_SAMPLES: [[&str; 4]; 2] = [
    ["Ali Khan", "0300 1234567", "12 Mall Road, Lahore", "ali.khan@example.com"],
    ["Sara Ahmed", "0321 7654321", "House 4, Clifton, Karachi", "sara.ahmed@example.com"],
];

const EXPORT_HEADERS: [&str; 8] = [
    "FULL NAME",
    "CONTACT NUMBER",
    "ADDRESS",
    "EMAIL",
    "SMS SENT",
    "SMS SENT AT",
    "CREATED AT",
    "UPDATED AT",
];

/// Empty import sheet: the required headers plus two example rows
pub fn build_import_template() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Customers")?;

    write_headers(sheet, &REQUIRED_COLUMNS)?;
    for (r, sample) in TEMPLATE_SAMPLES.iter().enumerate() {
        for (c, value) in sample.iter().enumerate() {
            sheet.write_string(r as u32 + 1, c as u16, *value)?;
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to build import template")
}

/// All customers with SMS status and timestamps
pub fn build_customer_export(customers: &[Customer]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Customers")?;

    write_headers(sheet, &EXPORT_HEADERS)?;
    for (idx, customer) in customers.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, &customer.full_name)?;
        sheet.write_string(row, 1, &customer.contact_number)?;
        sheet.write_string(row, 2, &customer.address)?;
        sheet.write_string(row, 3, &customer.email)?;
        sheet.write_string(row, 4, if customer.sms_sent { "Yes" } else { "No" })?;
        if let Some(sent_at) = customer.sms_sent_at {
            sheet.write_string(row, 5, sent_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
        }
        sheet.write_string(row, 6, customer.created_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
        sheet.write_string(row, 7, customer.updated_at.format("%Y-%m-%d %H:%M:%S").to_string())?;
    }

    workbook
        .save_to_buffer()
        .context("Failed to build customer export")
}

/// Download name for an export taken now
pub fn export_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("customers_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (c, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, *header, &bold)?;
        sheet.set_column_width(c as u16, 24)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::customer_import::{parser, validator};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_template_passes_import_validation() {
        let bytes = build_import_template().unwrap();
        let sheet = parser::parse_upload(&bytes, Some(TEMPLATE_FILENAME)).unwrap();

        assert_eq!(sheet.headers, REQUIRED_COLUMNS.to_vec());
        let rows = validator::validate(&sheet).unwrap();
        assert_eq!(rows.len(), TEMPLATE_SAMPLES.len());
    }

    #[test]
    fn test_export_contains_status_and_timestamps() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let customers = vec![
            Customer {
                id: Uuid::new_v4(),
                full_name: "Ali Khan".to_string(),
                contact_number: "0300 1234567".to_string(),
                address: "Lahore".to_string(),
                email: "ali@example.com".to_string(),
                sms_sent: true,
                sms_sent_at: Some(created),
                created_at: created,
                updated_at: created,
            },
            Customer {
                id: Uuid::new_v4(),
                full_name: "Sara Ahmed".to_string(),
                contact_number: "0321 7654321".to_string(),
                address: "Karachi".to_string(),
                email: "sara@example.com".to_string(),
                sms_sent: false,
                sms_sent_at: None,
                created_at: created,
                updated_at: created,
            },
        ];

        let bytes = build_customer_export(&customers).unwrap();
        let sheet = parser::parse_upload(&bytes, None).unwrap();

        assert_eq!(sheet.headers.len(), EXPORT_HEADERS.len());
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].get("SMS SENT"), "Yes");
        assert_eq!(sheet.rows[0].get("SMS SENT AT"), "2024-03-01 09:30:00");
        assert_eq!(sheet.rows[1].get("SMS SENT"), "No");
        assert_eq!(sheet.rows[1].get("SMS SENT AT"), "");
        assert_eq!(sheet.rows[1].get("CREATED AT"), "2024-03-01 09:30:00");
    }

    #[test]
    fn test_export_of_no_customers_has_headers_only() {
        let bytes = build_customer_export(&[]).unwrap();
        let sheet = parser::parse_upload(&bytes, None).unwrap();
        assert_eq!(sheet.headers[0], "FULL NAME");
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_export_filename() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
        assert_eq!(export_filename(now), "customers_20240301_093005.xlsx");
    }
}
