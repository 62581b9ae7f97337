use crate::json_schema;

pub fn run(name: &str, list: bool) -> anyhow::Result<()> {
    if list {
        for name in json_schema::schema_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let schema = json_schema::get_schema(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown schema: {}. Available: {}",
            name,
            json_schema::schema_names().join(", ")
        )
    })?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
