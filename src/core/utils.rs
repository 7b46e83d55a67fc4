use chrono::NaiveDateTime;

pub fn datetime_to_string(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn datetime_to_string_opt(datetime: Option<NaiveDateTime>) -> String {
    datetime.map(datetime_to_string).unwrap_or_default()
}

pub fn id_to_string_opt(id: Option<i32>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
