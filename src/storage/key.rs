// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Object key normalization shared by every backend

/// Convert a caller supplied path into the canonical object key
///
/// Empty and `.` segments are dropped and `..` pops the previous segment,
/// so the result never starts or ends with `/`, never contains `//`, and
/// can never climb above the bucket root. Normalizing twice is a no-op.
///
/// Examples:
/// - `/photos//cat.png` -> `photos/cat.png`
/// - `a/./b/../c/` -> `a/c`
/// - `../../etc/passwd` -> `etc/passwd`
pub fn normalize_key(key: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in key.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
