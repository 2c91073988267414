use crate::error::Result;
use crate::models::listing::ListingRecord;
use rust_xlsxwriter::*;

pub struct ExportService;

impl ExportService {
    fn strip_html(input: &str) -> String {
        let mut result = String::new();
        let mut inside_tag = false;

        for c in input.chars() {
            if c == '<' {
                inside_tag = true;
            } else if c == '>' {
                inside_tag = false;
                result.push(' ');
            } else if !inside_tag {
                result.push(c);
            }
        }

        result
            .replace("&nbsp;", " ")
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ExportService {
    /// Generate a styled XLSX workbook with one row per listing.
    pub fn generate_listings_xlsx(listings: &[ListingRecord]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Listings")?;

        // ── Color palette ──
        let primary_color = Color::RGB(0x1E293B); // Slate 800
        let header_bg = Color::RGB(0x0F172A); // Slate 900
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC); // Slate 50
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0); // Slate 200
        let link_color = Color::RGB(0x2563EB); // Blue 600

        // ── Column definitions ──
        let columns = [
            ("#", 6.0),
            ("Title", 32.0),
            ("Employer", 28.0),
            ("Location", 18.0),
            ("Work type", 14.0),
            ("Salary", 24.0),
            ("Min", 12.0),
            ("Max", 12.0),
            ("Period", 10.0),
            ("Posted", 12.0),
            ("Summary", 50.0),
            ("Emails", 30.0),
            ("Keyword", 20.0),
            ("Source", 16.0),
            ("Listing URL", 40.0),
            ("Apply URL", 40.0),
        ];

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }
        let last_col = (columns.len() - 1) as u16;

        // ── Title row ──
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(0, 0, 0, last_col, "Job listings", &title_format)?;

        // ── Subtitle row ──
        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(1, 22)?;
        let now = chrono::Utc::now().format("%d.%m.%Y %H:%M UTC").to_string();
        let subtitle_text = format!("Exported: {}  •  Listings: {}", now, listings.len());
        worksheet.merge_range(1, 0, 1, last_col, &subtitle_text, &subtitle_format)?;

        // ── Header row ──
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        // ── Data rows ──
        let data_start_row = 3;
        for (idx, listing) in listings.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);

            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let wrap_fmt = base_fmt.clone().set_text_wrap();
            let money_fmt = base_fmt.clone().set_num_format("#,##0.00");
            let link_fmt = base_fmt.clone().set_font_color(link_color).set_underline(FormatUnderline::Single);

            worksheet.set_row_height(row, 22)?;

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;

            let title_fmt = base_fmt.clone().set_bold();
            worksheet.write_string_with_format(row, 1, &listing.title, &title_fmt)?;
            worksheet.write_string_with_format(row, 2, &listing.employer, &base_fmt)?;
            worksheet.write_string_with_format(row, 3, &listing.location, &base_fmt)?;

            let work_type = listing.work_type.map(|wt| wt.as_str()).unwrap_or("—");
            worksheet.write_string_with_format(row, 4, work_type, &center_fmt)?;
            worksheet.write_string_with_format(row, 5, &listing.salary, &base_fmt)?;

            // Bounds
            for (col, bound) in [(6, listing.min_salary), (7, listing.max_salary)] {
                match bound {
                    Some(value) => worksheet.write_number_with_format(row, col, value, &money_fmt)?,
                    None => worksheet.write_string_with_format(row, col, "—", &center_fmt)?,
                };
            }

            let period = listing.pay_period.map(|p| p.as_str()).unwrap_or("—");
            worksheet.write_string_with_format(row, 8, period, &center_fmt)?;

            let posted = listing.date_posted.format("%Y-%m-%d").to_string();
            worksheet.write_string_with_format(row, 9, &posted, &center_fmt)?;

            worksheet.write_string_with_format(row, 10, Self::strip_html(&listing.summary), &wrap_fmt)?;

            let emails = if listing.emails.is_empty() {
                "—".to_string()
            } else {
                listing.emails.join(", ")
            };
            worksheet.write_string_with_format(row, 11, &emails, &wrap_fmt)?;
            worksheet.write_string_with_format(row, 12, &listing.search_keyword, &base_fmt)?;
            worksheet.write_string_with_format(row, 13, &listing.source, &base_fmt)?;

            // Links
            for (col, link) in [(14, &listing.listing_url), (15, &listing.apply_url)] {
                if link.is_empty() {
                    worksheet.write_string_with_format(row, col, "—", &center_fmt)?;
                } else {
                    worksheet.write_url_with_format(row, col, Url::new(link.as_str()), &link_fmt)?;
                }
            }
        }

        // ── Summary row ──
        let total_row = data_start_row + listings.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF)) // Indigo 100
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let with_salary = listings.iter().filter(|l| l.min_salary.is_some()).count();
        let with_email = listings.iter().filter(|l| !l.emails.is_empty()).count();
        let summary = format!(
            "Total: {} | With salary: {} | With email: {}",
            listings.len(),
            with_salary,
            with_email
        );
        worksheet.set_row_height(total_row, 26)?;
        worksheet.merge_range(total_row, 0, total_row, 5, &summary, &summary_fmt)?;

        // ── Freeze panes & autofilter ──
        worksheet.set_freeze_panes(data_start_row, 0)?;
        if !listings.is_empty() {
            let last_row = data_start_row + listings.len() as u32 - 1;
            worksheet.autofilter(header_row, 0, last_row, last_col)?;
        }

        let buf = workbook.save_to_buffer()?;
        Ok(buf)
    }
}
