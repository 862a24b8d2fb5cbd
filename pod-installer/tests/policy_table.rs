// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use pod_installer::checks::CHECK_COUNT;
use pod_installer::policy::PolicyTable;

#[test]
fn test_policy_table_rendering() {
    let table = PolicyTable::standard(CHECK_COUNT).unwrap();
    expectorate::assert_contents("tests/output/policy-table.txt", &table.render());
}

#[test]
fn test_policy_table_is_consistent() {
    let table = PolicyTable::standard(CHECK_COUNT).unwrap();
    assert_eq!(table.audit(), vec![]);
}
