//! Embedded default schemas
//!
//! Compiled into the binary and used unless `pipelines.<kind>.schema-file` is set.

/// Operations: one row per provider
pub const OPERATIONS_SCHEMA: &str = r#"
id: nid
columns:
  nid: nid
  provider_name: name
  rating_compliance: ratings.compliance[0].rating
  agedCareHomes_occupancy_value: operationsData.agedCareHomes.occupancy.value.value
  agedCareHomes_occupancy_median: operationsData.agedCareHomes.occupancy.median.value
  residents_lastYear: operationsData.agedCareHomes.residents.lastYear.value
  residents_newResidents: operationsData.agedCareHomes.residents.newResidents.value
  residents_ceasedResidents: operationsData.agedCareHomes.residents.ceasedResidents.value
  reportingPeriod: operationsData.financialReport.annual.reportingPeriod.value.reportingPeriod
  governmentFunding_total: operationsData.financialReport.annual.income.items.governmentFunding.total.value
  governmentFunding_value: operationsData.financialReport.annual.income.items.governmentFunding.value.value
  income_total: operationsData.financialReport.annual.income.total.value.value
  careNursing_total: operationsData.financialReport.annual.expenses.items.careNursing.total.value
  registeredNurses_value: operationsData.financialReport.annual.expenses.items.careNursing.subitems.registeredNurses.value.value
  expenses_total: operationsData.financialReport.annual.expenses.total.value.value
  dailyPerResident_value: operationsData.financialReport.annual.dailyPerResident.value.value
  wages_achTotal_total: operationsData.financialReport.quarterly.wages.achTotal.total.value
  wages_achTotal_value: operationsData.financialReport.quarterly.wages.achTotal.value.value
"#;

/// RADs: one row per room type
pub const RADS_SCHEMA: &str = r#"
id: nid
expand: ach_room_costs.subtypes
columns:
  nid: nid
  provider_name: name
  room_type: { element: productName }
  maximumRAD: { element: maximumRAD }
  address: serviceProvider.address
  suburb_postcode: { join: [serviceProvider.city, serviceProvider.postcode] }
  state: serviceProvider.state
"#;
