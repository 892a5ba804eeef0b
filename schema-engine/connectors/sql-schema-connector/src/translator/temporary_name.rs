/// `Temp<name>`, or `Temp<name>1`, `Temp<name>2`... when taken.
pub fn temporary_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let base = format!("Temp{name}");

    if !is_taken(&base) {
        return base;
    }

    (1..)
        .map(|suffix| format!("{base}{suffix}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn temporary_names_do_not_collide() {
        assert_eq!(temporary_name("Age", |_| false), "TempAge");

        let taken = ["TempAge", "TempAge1"];
        assert_eq!(temporary_name("Age", |name| taken.contains(&name)), "TempAge2");
    }
}
