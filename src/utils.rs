use std::io;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument};

#[instrument]
pub fn get_user_input() -> Result<Vec<String>> {
    println!("请输入章节编号(以空格分割): ");
    let mut chapters = String::new();
    io::stdin().read_line(&mut chapters)?;
    debug!("用户输入: {}", chapters);
    Ok(split_chapters(&chapters))
}

pub fn split_chapters(input: &str) -> Vec<String> {
    input.split_whitespace().map(|s| s.to_owned()).collect()
}

pub fn format_elapsed(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let mins = total_ms / 60000;
    let secs = (total_ms % 60000) / 1000;
    let ms = total_ms % 1000;

    if mins > 0 {
        // 超过1分钟：显示分秒
        if ms > 0 {
            format!("{}分{}秒{}毫秒", mins, secs, ms)
        } else {
            format!("{}分{}秒", mins, secs)
        }
    } else if secs > 0 {
        if ms > 0 {
            format!("{}秒{}毫秒", secs, ms)
        } else {
            format!("{}秒", secs)
        }
    } else {
        format!("{}毫秒", ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        assert_eq!(split_chapters(" 137 138\t139\n"), vec!["137", "138", "139"]);
        assert!(split_chapters("   ").is_empty());
    }

    #[test]
    fn formats_elapsed_time() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250毫秒");
        assert_eq!(format_elapsed(Duration::from_millis(3000)), "3秒");
        assert_eq!(format_elapsed(Duration::from_millis(3042)), "3秒42毫秒");
        assert_eq!(format_elapsed(Duration::from_millis(125_000)), "2分5秒");
        assert_eq!(format_elapsed(Duration::from_millis(125_007)), "2分5秒7毫秒");
    }
}
