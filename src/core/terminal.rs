use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static GLOBE: Emoji<'_, '_> = Emoji("🌐 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_step(step: &str) {
    println!("{} {}", SPARKLE, style(step).bold());
}

pub fn print_link(label: &str, url: &str) {
    println!(
        "  {} {}: {}",
        GLOBE,
        style(label).bold(),
        style(url).underlined().cyan()
    );
}

/// Prints an aligned `command  description` line for help output.
pub fn print_command(command: &str, description: &str) {
    println!("  {:<34} {}", style(command).green(), style(description).dim());
}

pub fn print_section(title: &str) {
    println!("\n {}", style(title).bold().underlined());
}

const BANNER: [&str; 6] = [
    " _                      _            ",
    "| |_ __ _ _ __ ___  ___| |_ ___ _ __ ",
    "| __/ _` | '__/ _ \\/ __| __/ _ \\ '__|",
    "| || (_| | | | (_) \\__ \\ ||  __/ |   ",
    " \\__\\__, |_|  \\___/|___/\\__\\___|_|   ",
    "    |___/                            ",
];

const TAGLINE: &str = "Group rosters, collected once and kept.";

/// Evenly spaced RGB stops, sampled with `t` in per-mille.
struct Gradient(&'static [(u8, u8, u8)]);

impl Gradient {
    fn at(&self, t: u32) -> (u8, u8, u8) {
        let stops = self.0;
        let spans = (stops.len() - 1) as u32;
        let scaled = t.min(1000) * spans;
        let idx = ((scaled / 1000) as usize).min(stops.len() - 2);
        let local = scaled - idx as u32 * 1000;
        lerp_color(stops[idx], stops[idx + 1], local)
    }
}

// sky, indigo, emerald
static BANNER_GRADIENT: Gradient = Gradient(&[(56, 189, 248), (129, 140, 248), (52, 211, 153)]);

pub fn print_banner() {
    if !console::colors_enabled() {
        println!();
        for line in BANNER {
            println!("{}", line);
        }
        println!("{}\n", TAGLINE);
        return;
    }

    // Diagonal sweep: each row shifts the gradient as far as ten columns would.
    let width = BANNER[0].len() as u32;
    let span = width + (BANNER.len() as u32 - 1) * 10;

    let mut out = String::from("\n");
    for (row, line) in BANNER.iter().enumerate() {
        for (col, ch) in line.chars().enumerate() {
            if ch == ' ' {
                out.push(' ');
                continue;
            }
            let t = (col as u32 + row as u32 * 10) * 1000 / span;
            let (r, g, b) = BANNER_GRADIENT.at(t);
            out.push_str(&format!("\x1b[38;2;{};{};{}m{}", r, g, b, ch));
        }
        out.push_str("\x1b[0m\n");
    }
    print!("{}", out);
    println!("{}\n", style(TAGLINE).green());
}

fn lerp_color(a: (u8, u8, u8), b: (u8, u8, u8), t: u32) -> (u8, u8, u8) {
    let mix = |x: u8, y: u8| ((x as u32 * (1000 - t) + y as u32 * t) / 1000) as u8;
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

pub fn print_goodbye() {
    println!("\n{} {}", SPARKLE, style("tgroster stopped. Bye!").bold().cyan());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints_match_stops() {
        let a = (0, 100, 200);
        let b = (200, 100, 0);
        assert_eq!(lerp_color(a, b, 0), a);
        assert_eq!(lerp_color(a, b, 1000), b);
        assert_eq!(lerp_color(a, b, 500), (100, 100, 100));
    }

    #[test]
    fn gradient_passes_through_every_stop() {
        let g = Gradient(&[(0, 0, 0), (100, 100, 100), (200, 0, 0)]);
        assert_eq!(g.at(0), (0, 0, 0));
        assert_eq!(g.at(500), (100, 100, 100));
        assert_eq!(g.at(1000), (200, 0, 0));
        assert_eq!(g.at(5000), (200, 0, 0));
    }

    #[test]
    fn banner_rows_share_a_width() {
        assert!(BANNER.iter().all(|l| l.len() == BANNER[0].len()));
    }
}
