/// Derive the code fence language tag for a directive target.
///
/// The tag is everything after the final `.` of the target, so
/// `sub/code.py` becomes `py` and `https://example.com/main.go` becomes
/// `go`. A target without any `.` is returned whole. The result is not
/// checked against a list of known languages; it is written verbatim into
/// the fence info string.
pub fn language_tag(target: &str) -> &str {
	target.rsplit_once('.').map_or(target, |(_, extension)| extension)
}
