use restcue_core::Profile;
use serde::Serialize;

#[derive(Serialize)]
struct ProfileRow {
    name: &'static str,
    work_minutes: u64,
    break_minutes: u64,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let rows: Vec<ProfileRow> = Profile::ALL
        .iter()
        .map(|p| ProfileRow {
            name: p.as_str(),
            work_minutes: p.work_min(),
            break_minutes: p.break_min(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!(
            "{:<8} {:>3} min work / {:>2} min break",
            row.name, row.work_minutes, row.break_minutes
        );
    }
    println!("{:<8} work/break cycle off", "none");
    Ok(())
}
