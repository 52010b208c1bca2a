/// Environment variable holding the server's start parameters.
pub const START_PARAMS_ENV: &str = "ASA_START_PARAMS";

const SEPARATORS: [char; 2] = [' ', '?'];

/// Finds the value of `key` in a start-parameter string such as
/// `TheIsland_WP?listen?RCONPort=27020 -WinLiveMaxPlayers=50`.
///
/// The value runs from the `=` up to the next space or `?`. A key only matches at the start of a
/// token, so looking up `Port` does not pick up `RCONPort`. Empty values count as missing.
pub fn start_param_value<'a>(start_params: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{}=", key);

    let mut search_from = 0;
    while let Some(found) = start_params[search_from..].find(&needle) {
        let offset = search_from + found;
        search_from = offset + needle.len();

        let at_token_start = start_params[..offset]
            .chars()
            .next_back()
            .map_or(true, |prev| SEPARATORS.contains(&prev) || prev == '-');
        if !at_token_start {
            continue;
        }

        let rest = &start_params[search_from..];
        let value = match rest.find(SEPARATORS) {
            Some(end) => &rest[..end],
            None => rest,
        };

        return if value.is_empty() { None } else { Some(value) };
    }

    None
}
